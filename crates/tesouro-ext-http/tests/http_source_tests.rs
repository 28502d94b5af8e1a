//! HTTP source tests against a local upstream.

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use rust_decimal_macros::dec;

use tesouro_ext_http::{BrowserClient, CsvBondSource, JsonBondSource, DEFAULT_TIMEOUT};
use tesouro_traits::{BondSource, ParsedBonds, RawDatasets, SourceError};

const DOCUMENT: &str = r#"{"response": {
    "BizSts": {"dtTm": "2026-10-19 11:00:00.000"},
    "TrsrBdTradgList": [
        {"TrsrBd": {"nm": "Tesouro Prefixado 2029", "anulInvstmtRate": 13.12,
                    "untrInvstmtVal": 685.37, "minInvstmtAmt": 34.26,
                    "anulRedRate": 13.24, "untrRedVal": 682.10, "minRedVal": 0}}
    ]
}}"#;

const INVEST: &str = "Título;Rendimento anual do título;Investimento mínimo;Preço unitário de investimento;Vencimento do Título\n\
    Tesouro Selic 2029;SELIC + 0,0536%;R$ 165,12;R$ 16.512,37;01/03/2029\n";

const REDEEM: &str = "Título;Rendimento anual do título;Preço unitário de resgate;Vencimento do Título\n\
    Tesouro Selic 2029;SELIC + 0,0636%;R$ 16.498,02;01/03/2029\n";

async fn bonds_json(headers: HeaderMap) -> (StatusCode, &'static str) {
    let chrome = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.contains("Chrome/"));
    if chrome {
        (StatusCode::OK, DOCUMENT)
    } else {
        (StatusCode::FORBIDDEN, "")
    }
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/bonds.json", get(bonds_json))
        .route("/invest.csv", get(|| async { INVEST }))
        .route("/redeem.csv", get(|| async { REDEEM }))
        .route(
            "/unavailable",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client() -> BrowserClient {
    BrowserClient::new(DEFAULT_TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_json_source_fetch_and_parse() {
    let addr = spawn_upstream().await;
    let source = JsonBondSource::new(client(), format!("http://{addr}/bonds.json"));

    let raw = source.fetch().await.unwrap();
    assert!(matches!(raw, RawDatasets::Json(_)));

    let ParsedBonds::Unified {
        bonds,
        business_time,
    } = source.parse(raw).unwrap()
    else {
        panic!("expected unified bonds");
    };
    assert_eq!(business_time, "2026-10-19 11:00:00.000");
    assert_eq!(bonds.len(), 1);
    assert!(bonds[0].investable);
    assert_eq!(bonds[0].minimum_investment_amount, Some(dec!(34.26)));
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let addr = spawn_upstream().await;
    let source = JsonBondSource::new(client(), format!("http://{addr}/unavailable"));

    let err = source.fetch().await.unwrap_err();
    assert!(err.is_transport());
    match err {
        SourceError::UnexpectedStatus { status, url } => {
            assert_eq!(status, 503);
            assert!(url.ends_with("/unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_client_is_rejected_by_bot_filter() {
    let addr = spawn_upstream().await;
    let source = JsonBondSource::new(
        BrowserClient::with_client(reqwest::Client::new()),
        format!("http://{addr}/bonds.json"),
    );

    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, SourceError::UnexpectedStatus { status: 403, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = JsonBondSource::new(client(), format!("http://{addr}/bonds.json"));
    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, SourceError::ConnectionFailed(_)));
}

#[tokio::test]
async fn test_csv_source_fetches_both_datasets() {
    let addr = spawn_upstream().await;
    let source = CsvBondSource::new(
        client(),
        format!("http://{addr}/invest.csv"),
        format!("http://{addr}/redeem.csv"),
    );

    let raw = source.fetch().await.unwrap();
    let ParsedBonds::Split { invest, redeem } = source.parse(raw).unwrap() else {
        panic!("expected split datasets");
    };
    assert_eq!(invest.len(), 1);
    assert_eq!(redeem.len(), 1);
    assert_eq!(invest[0].unitary_investment_value, dec!(16512.37));
    assert_eq!(redeem[0].unitary_redemption_value, dec!(16498.02));
}

#[tokio::test]
async fn test_csv_source_fails_when_one_dataset_fails() {
    let addr = spawn_upstream().await;
    let source = CsvBondSource::new(
        client(),
        format!("http://{addr}/invest.csv"),
        format!("http://{addr}/unavailable"),
    );

    let err = source.fetch().await.unwrap_err();
    assert!(err.is_transport());
}
