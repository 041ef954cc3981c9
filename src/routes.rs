use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use http_types::headers::HeaderValue;
use serde_json::json;
use tide::security::{CorsMiddleware, Origin};
use tide::{Body, Request, Response, Server, StatusCode};

use crate::fetch::with_retry;
use crate::ledger::Window;
use crate::state::AppState;

/// Builds the HTTP server with middleware and every route attached.
pub fn server(state: Arc<AppState>, allowed_origins: &[String]) -> Server<Arc<AppState>> {
    let mut app = tide::with_state(state);
    app.with(tide::utils::Before(log_request));
    let origin: Origin = if allowed_origins.iter().any(|o| o == "*") {
        "*".into()
    } else {
        allowed_origins.to_vec().into()
    };
    app.with(
        CorsMiddleware::new()
            .allow_methods("GET, OPTIONS".parse::<HeaderValue>().expect("static header value"))
            .allow_origin(origin),
    );
    // interpret errors
    app.with(tide::utils::After(|mut res: Response| async move {
        if let Some(err) = res.error() {
            let err_str = format!("ERROR: {:?}", err);
            log::warn!("{}", err_str);
            res.set_body(err_str);
        }
        Ok(res)
    }));
    route(&mut app);
    app
}

fn route(app: &mut Server<Arc<AppState>>) {
    app.at("/").get(hello);
    app.at("/check").get(check);
    app.at("/api/address/:address").get(get_address);
    app.at("/api/rawtx/:txid").get(get_raw_tx);
}

async fn log_request<T>(req: Request<T>) -> Request<T> {
    log::info!("{} {}", req.method(), req.url());
    req
}

async fn hello(_req: Request<Arc<AppState>>) -> tide::Result<Body> {
    Ok("Hello THERE!".into())
}

async fn check(_req: Request<Arc<AppState>>) -> tide::Result<Body> {
    Ok("OK".into())
}

async fn get_address(req: Request<Arc<AppState>>) -> tide::Result<Response> {
    let address = req.param("address")?.to_owned();
    let query: BTreeMap<String, String> = req.query().unwrap_or_default();
    let window = Window::from_query(&query);
    log::info!("fetching data for address: {}", address);
    match req.state().address_ledger(&address, window).await {
        Ok(envelope) => Ok(Response::builder(StatusCode::Ok)
            .body(Body::from_json(&envelope)?)
            .build()),
        Err(err) => {
            log::error!("cannot build ledger for {}: {:?}", address, err);
            internal_error("Failed to fetch address data.", err)
        }
    }
}

async fn get_raw_tx(req: Request<Arc<AppState>>) -> tide::Result<Response> {
    let txid = req.param("txid")?.to_owned();
    let state = req.state();
    match with_retry(state.policy(), || state.explorer().raw_tx_hex(&txid)).await {
        Ok(hex) => Ok(Response::builder(StatusCode::Ok)
            .content_type(tide::http::mime::PLAIN)
            .body(hex)
            .build()),
        Err(err) => {
            log::warn!("bad upstream for raw tx {}: {}", txid, err);
            internal_error("Failed to fetch raw transaction.", err)
        }
    }
}

fn internal_error(error: &str, details: impl Display) -> tide::Result<Response> {
    let body = json!({ "error": error, "details": details.to_string() });
    Ok(Response::builder(StatusCode::InternalServerError)
        .body(Body::from_json(&body)?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esplora::mock::MockExplorer;
    use crate::esplora::{AddressSummary, TxoStats};
    use crate::fetch::FetchPolicy;
    use crate::ledger::assign_index;
    use crate::ledger::fixtures::*;
    use serde_json::Value;

    fn app(explorer: MockExplorer) -> Server<Arc<AppState>> {
        let state = AppState::new(Arc::new(explorer), FetchPolicy::default());
        server(Arc::new(state), &["*".to_string()])
    }

    fn explorer() -> MockExplorer {
        let txs = coinbase_then_spend();
        let mut explorer = MockExplorer::new(txs.clone());
        explorer.summary = Some(AddressSummary {
            chain_stats: TxoStats {
                tx_count: 2,
                funded_txo_sum: 7000,
                spent_txo_sum: 5000,
            },
            mempool_stats: TxoStats::default(),
        });
        explorer.utxos = Some(vec![utxo(&txs[0].txid, 1, 2000)]);
        explorer.raw_hex.insert(txs[0].txid.clone(), "0200000001".into());
        explorer
    }

    async fn get(app: &Server<Arc<AppState>>, path: &str) -> http_types::Response {
        let url = http_types::Url::parse(&format!("http://localhost{}", path)).unwrap();
        let req = http_types::Request::get(url);
        app.respond(req).await.unwrap()
    }

    #[test]
    fn address_ledger() {
        smol::block_on(async {
            let app = app(explorer());
            let mut res = get(&app, &format!("/api/address/{}", ME)).await;
            assert_eq!(res.status(), StatusCode::Ok);
            let body: Value = res.body_json().await.unwrap();
            assert_eq!(body["hash160"], "751e76e8199196d454941c45d1b3a323f1433bd6");
            assert_eq!(body["address"], ME);
            assert_eq!(body["n_tx"], 2);
            assert_eq!(body["n_unredeemed"], 1);
            assert_eq!(body["final_balance"], 2000);
            assert_eq!(body["txs"].as_array().unwrap().len(), 2);
            assert_eq!(body["txs"][0]["balance"], 2000);
            let spender_index = assign_index(&"bb".repeat(32), 101);
            assert_eq!(
                body["txs"][1]["out"][0]["spending_outpoints"][0]["tx_index"],
                spender_index
            );
        })
    }

    #[test]
    fn address_paging_and_bad_params() {
        smol::block_on(async {
            let app = app(explorer());
            let mut res = get(&app, &format!("/api/address/{}?offset=0&limit=1", ME)).await;
            let body: Value = res.body_json().await.unwrap();
            assert_eq!(body["txs"].as_array().unwrap().len(), 1);
            assert_eq!(body["txs"][0]["hash"], "bb".repeat(32));

            let mut res = get(&app, &format!("/api/address/{}?offset=9", ME)).await;
            assert_eq!(res.status(), StatusCode::Ok);
            let body: Value = res.body_json().await.unwrap();
            assert!(body["txs"].as_array().unwrap().is_empty());

            let mut res = get(&app, &format!("/api/address/{}?limit=x&offset=y", ME)).await;
            let body: Value = res.body_json().await.unwrap();
            assert_eq!(body["txs"].as_array().unwrap().len(), 2);
        })
    }

    #[test]
    fn upstream_outage_degrades() {
        smol::block_on(async {
            let app = app(MockExplorer::new(vec![]));
            let mut res = get(&app, "/api/address/garbage").await;
            assert_eq!(res.status(), StatusCode::Ok);
            let body: Value = res.body_json().await.unwrap();
            assert_eq!(body["hash160"], "");
            assert_eq!(body["n_tx"], 0);
            assert_eq!(body["n_unredeemed"], 0);
            assert_eq!(body["final_balance"], 0);
            assert!(body["txs"].as_array().unwrap().is_empty());
        })
    }

    #[test]
    fn raw_tx() {
        smol::block_on(async {
            let app = app(explorer());
            let mut res = get(&app, &format!("/api/rawtx/{}", "bb".repeat(32))).await;
            assert_eq!(res.status(), StatusCode::Ok);
            assert!(res
                .content_type()
                .map_or(false, |mime| mime.essence() == "text/plain"));
            assert_eq!(res.body_string().await.unwrap(), "0200000001");

            let mut res = get(&app, "/api/rawtx/missing").await;
            assert_eq!(res.status(), StatusCode::InternalServerError);
            let body: Value = res.body_json().await.unwrap();
            assert_eq!(body["error"], "Failed to fetch raw transaction.");
            assert!(body["details"].as_str().unwrap().contains("503"));
        })
    }

    #[test]
    fn liveness() {
        smol::block_on(async {
            let app = app(explorer());
            assert_eq!(get(&app, "/").await.body_string().await.unwrap(), "Hello THERE!");
            assert_eq!(get(&app, "/check").await.body_string().await.unwrap(), "OK");
        })
    }
}
