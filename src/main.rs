fn main() {
    if let Err(err) = rowglaze::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
