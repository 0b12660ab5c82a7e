#[tokio::main]
async fn main() {
    let code = fundscope_lib::app::run().await;
    std::process::exit(code);
}
