#![windows_subsystem = "windows"]

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--print-config") {
        let config = oriterm_atlas::config::RenderConfig::default();
        match toml::to_string_pretty(&config) {
            Ok(s) => print!("{s}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("oriterm_atlas {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("oriterm_atlas {}", env!("CARGO_PKG_VERSION"));
        println!("Glyph-atlas text renderer demo\n");
        println!("USAGE:");
        println!("    oriterm_atlas [OPTIONS]\n");
        println!("OPTIONS:");
        println!("    --print-config    Print the default configuration to stdout");
        println!("    --version, -V     Print version information");
        println!("    --help, -h        Print this help message");
        return;
    }

    if let Err(e) = oriterm_atlas::app::App::run() {
        log::error!("fatal: {e}");
        let _ = std::fs::write("oriterm_atlas_error.log", format!("{e:?}"));
    }
}
