mod prober;
