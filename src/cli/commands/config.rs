use crate::cli::OutputFormat;
use crate::config;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let redacted = config::config().redacted();

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
        OutputFormat::Text => {
            println!("environment: {:?}", redacted.environment);
            println!("listen:      {}", redacted.bind_addr());
            println!("store:       {:?}", redacted.store.backend);
            println!("database:    {}", redacted.database.url.as_deref().unwrap_or("<unset>"));
            println!("jwt expiry:  {}h", redacted.security.jwt_expiry_hours);
            println!("cors:        {}", redacted.security.enable_cors);
        }
    }
    Ok(())
}
