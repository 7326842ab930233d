use std::process;

use bg_removal_rs::{BackgroundRemover, Config};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::new();

    if !config.input.exists() {
        println!("❌ Input file does not exist: {}", config.input.display());
        process::exit(1);
    }

    // 処理の失敗は表示のみで、終了コードは 0 のまま
    match BackgroundRemover::with_onnx_model(&config) {
        Ok(remover) => remover.remove_background_from_file(&config.input, &config.output),
        Err(e) => println!("❌ {}", e),
    }
}
