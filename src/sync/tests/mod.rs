mod action;
mod controller;
