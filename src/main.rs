fn main() {
    if let Err(err) = org_chart_renderer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
