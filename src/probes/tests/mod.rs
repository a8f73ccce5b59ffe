
mod data_probe_tests;
