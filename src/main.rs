fn main() {
    if let Err(err) = cloud_state_report::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
