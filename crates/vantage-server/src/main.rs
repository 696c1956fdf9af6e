#[tokio::main]
async fn main() {
    vantage_server::start_server().await;
}
