fn main() {
    if let Err(err) = rangelog_lib::run() {
        log::error!("Rangelog failed: {err:#}");
        std::process::exit(1);
    }
}
