use openplugin::app::App;
use openplugin::errors::PluginError;
use openplugin::models::ResolvedCallParams;
use tokio::io::AsyncReadExt;

async fn run() -> Result<(), PluginError> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    let params: ResolvedCallParams = serde_json::from_str(&input)?;

    let app = App::initialize()?;
    let response = app.operation_execution.run(&params).await?;
    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|err| PluginError::internal(format!("Failed to encode response: {}", err)))?;
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("openplugin: {}", err);
        std::process::exit(1);
    }
}
