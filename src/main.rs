use solax_monitor::prelude::*;

#[tokio::main]
async fn main() {
    let options = Options::new();

    if let Err(err) = solax_monitor::run(options).await {
        error!("Application error: {:?}", err);
        std::process::exit(255);
    }
}
