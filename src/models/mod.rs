pub mod bench_config;
