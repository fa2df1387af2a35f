fn main() {
    match mojdomek_home_api::app::run_setup() {
        Ok(title) => println!("{title}"),
        Err(err) => {
            eprintln!("setup rejected: {err}");
            std::process::exit(1);
        }
    }
}
