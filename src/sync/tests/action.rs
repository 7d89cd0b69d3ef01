use crate::error::SyncError;
use crate::sync::{SyncAction, seek_command};

#[test]
fn test_command_literals() {
    assert_eq!(SyncAction::Play.to_command(), "play");
    assert_eq!(SyncAction::Pause.to_command(), "pause");
    assert_eq!(SyncAction::Restart.to_command(), "restart");
    assert_eq!(SyncAction::Load("foo.mp4".into()).to_command(), "load foo.mp4");
    assert_eq!(SyncAction::SetRate(1.0).to_command(), "set_rate 1.00");
    assert_eq!(SyncAction::SetRate(0.755).to_command(), "set_rate 0.76");
}

#[test]
fn test_seek_command_has_three_decimals() {
    assert_eq!(seek_command(10.0), "seek_to_time 10.000");
    assert_eq!(seek_command(1.23456), "seek_to_time 1.235");
}

#[test]
fn test_from_command() {
    assert_eq!(SyncAction::from_command("play", &[]).unwrap(), SyncAction::Play);
    assert_eq!(
        SyncAction::from_command("load", &["my", "clip.mp4"]).unwrap(),
        SyncAction::Load("my clip.mp4".into())
    );
    assert_eq!(
        SyncAction::from_command("set_rate", &["1.25"]).unwrap(),
        SyncAction::SetRate(1.25)
    );
}

#[test]
fn test_from_command_rejects_bad_arguments() {
    assert!(matches!(
        SyncAction::from_command("load", &[]),
        Err(SyncError::InvalidArgument { .. })
    ));
    assert!(matches!(
        SyncAction::from_command("set_rate", &["fast"]),
        Err(SyncError::InvalidArgument { .. })
    ));
    assert!(matches!(
        SyncAction::from_command("set_rate", &["-1"]),
        Err(SyncError::InvalidArgument { .. })
    ));
    assert!(matches!(
        SyncAction::from_command("volume", &["1"]),
        Err(SyncError::MalformedPayload { .. })
    ));
}
