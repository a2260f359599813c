use crate::cli::UploadArgs;
use crate::commands::{backend_client, fail, load_config};
use crate::exit_codes;
use enose_rs::ingestion::IngestionClient;
use enose_rs::types::CollaboratorError;

pub async fn execute(api_url: Option<&str>, args: UploadArgs) -> i32 {
    let config = match load_config(api_url) {
        Ok(config) => config,
        Err(code) => return code,
    };
    if config.edge_impulse_api_key.is_none() {
        eprintln!("Error: {}", CollaboratorError::MissingConfig("EDGE_IMPULSE_API_KEY"));
        return exit_codes::CONFIG_ERROR;
    }

    let backend = match backend_client(&config) {
        Ok(backend) => backend,
        Err(code) => return code,
    };
    let ingestion = match IngestionClient::new(
        &config.edge_impulse_url,
        config.edge_impulse_api_key.clone(),
        config.request_timeout,
    ) {
        Ok(client) => client,
        Err(e) => return fail(e),
    };

    let records = match backend.session_data().await {
        Ok(records) => records,
        Err(e) => return fail(e),
    };

    match ingestion.upload(&args.label, &records).await {
        Ok(receipt) => {
            println!(
                "Uploaded {} samples as {} (label: {})",
                receipt.samples, receipt.file_name, receipt.label
            );
            exit_codes::SUCCESS
        }
        Err(e) => fail(e),
    }
}
