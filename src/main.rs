fn main() {
    if let Err(err) = mojdomek_home_api::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
