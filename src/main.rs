fn main() {
    if let Err(err) = flowlink::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
