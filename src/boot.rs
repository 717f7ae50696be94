use getopts::Options;
use socksd::server::ServerConfig;

use std::net::SocketAddr;
use std::time::Duration;


pub fn boot_server() -> ServerConfig {
    // 设定日志等级
    if let Err(_) = std::env::var("RUST_LOG") {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    // 读取参数配置
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("socksd");
    let opts = options();

    match parse_args(&opts, args.get(1..).unwrap_or(&[])) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print_usage(program, &opts);
            std::process::exit(0);
        },
        Err(e) => {
            eprintln!("{}", e);
            print_usage(program, &opts);
            std::process::exit(2);
        },
    }
}

fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("b", "bind", "listen address (default 127.0.0.1:1080)", "ADDR");
    opts.optopt("t", "timeout", "outbound connect timeout in seconds (default 30)", "SECS");
    opts.optflag("h", "help", "print this help menu");
    opts
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

/// `Ok(None)` means help was requested.
fn parse_args(opts: &Options, args: &[String]) -> Result<Option<ServerConfig>, String> {
    let matches = opts.parse(args).map_err(|e| e.to_string())?;
    if matches.opt_present("h") {
        return Ok(None);
    }

    let mut config = ServerConfig::default();
    if let Some(bind) = matches.opt_str("b") {
        config.bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid bind address {:?}: {}", bind, e))?;
    }
    if let Some(secs) = matches.opt_str("t") {
        let secs = secs
            .parse::<u64>()
            .map_err(|e| format!("invalid timeout {:?}: {}", secs, e))?;
        if secs == 0 {
            return Err("timeout must be at least one second".to_string());
        }
        config.connect_timeout = Duration::from_secs(secs);
    }

    Ok(Some(config))
}
