#[macro_use]
extern crate log;
extern crate env_logger;
extern crate getopts;
extern crate tokio;
extern crate socksd;


mod boot;

use socksd::server::SocksServer;


fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = boot::boot_server();
    debug!("{:?}", config);

    let rt = tokio::runtime::Runtime::new()?;
    let server = rt.block_on(SocksServer::new(config))?;

    rt.block_on(server.run_forever())?;

    Ok(())
}
