//! HTTPS server startup.

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;

use super::lifecycle::serve_with_shutdown;
use super::{ServerError, ServerResult, shutdown_signal};
use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;

/// Serves `app` over HTTPS with the configured certificate and key.
pub async fn serve_https(app: Router, server_config: ServerConfig) -> ServerResult<()> {
    server_config
        .validate()
        .map_err(|err| ServerError::InvalidConfig(err.to_string()))?;

    let (Some(cert_path), Some(key_path)) = (
        server_config.tls_cert_path.clone(),
        server_config.tls_key_path.clone(),
    ) else {
        return Err(ServerError::TlsCertificate(
            "TLS_CERT_PATH and TLS_KEY_PATH are required".to_owned(),
        ));
    };

    validate_tls_file(&cert_path, "Certificate")?;
    validate_tls_file(&key_path, "Private key")?;

    let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
        .await
        .map_err(|err| ServerError::TlsCertificate(err.to_string()))?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        cert_path = %cert_path.display(),
        key_path = %key_path.display(),
        "TLS certificates loaded"
    );

    let server_addr = server_config.server_addr();
    let shutdown_timeout = server_config.shutdown_timeout();
    serve_with_shutdown(&server_config, move || async move {
        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();

        tokio::spawn(async move {
            shutdown_signal(shutdown_timeout).await;
            shutdown_handle.graceful_shutdown(Some(shutdown_timeout));
        });

        axum_server::bind_rustls(server_addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
    })
    .await
}

fn validate_tls_file(path: &Path, file_type: &str) -> ServerResult<()> {
    let metadata = std::fs::metadata(path).map_err(|err| {
        ServerError::TlsCertificate(format!(
            "Cannot read {} file {}: {}",
            file_type,
            path.display(),
            err
        ))
    })?;

    if !metadata.is_file() || metadata.len() == 0 {
        return Err(ServerError::TlsCertificate(format!(
            "{} file is empty or not a file: {}",
            file_type,
            path.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_files() {
        let result = validate_tls_file(Path::new("missing_cert.pem"), "Certificate");
        assert!(
            matches!(result, Err(ServerError::TlsCertificate(msg)) if msg.contains("Certificate"))
        );
    }
}
