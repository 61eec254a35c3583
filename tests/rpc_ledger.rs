//! JSON-RPC ledger against a mocked node.

use std::time::Duration;

use decentral_store::ledger::{JsonRpcLedger, LedgerClient, LedgerError, RpcLedgerConfig, TxHandle};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
const FROM: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const TX: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

fn test_ledger(server: &MockServer) -> JsonRpcLedger {
    JsonRpcLedger::new(RpcLedgerConfig {
        url: server.uri(),
        contract_address: CONTRACT.into(),
        from_address: FROM.into(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

#[tokio::test]
async fn submit_sends_payload_as_transaction_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_sendTransaction",
            "params": [{"from": FROM, "to": CONTRACT, "data": "0x7b7d"}]
        })))
        .respond_with(rpc_result(json!(TX)))
        .expect(1)
        .mount(&server)
        .await;

    let tx = test_ledger(&server).submit(b"{}").await.unwrap();
    assert_eq!(tx, TxHandle(TX.into()));
}

#[tokio::test]
async fn submit_error_object_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "insufficient funds for gas"}
        })))
        .mount(&server)
        .await;

    let err = test_ledger(&server).submit(b"{}").await.unwrap_err();
    assert_eq!(err, LedgerError::Rejected("insufficient funds for gas (code -32000)".into()));
}

#[tokio::test]
async fn missing_receipt_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt", "params": [TX]})))
        .respond_with(rpc_result(json!(null)))
        .mount(&server)
        .await;

    let receipt = test_ledger(&server).receipt(&TxHandle(TX.into())).await.unwrap();
    assert!(receipt.is_none());
}

#[tokio::test]
async fn mined_receipt_reports_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(rpc_result(json!({
            "transactionHash": TX,
            "blockNumber": "0x1b4",
            "status": "0x1"
        })))
        .mount(&server)
        .await;

    let receipt = test_ledger(&server)
        .receipt(&TxHandle(TX.into()))
        .await
        .unwrap()
        .expect("receipt should be available");
    assert_eq!(receipt.block_number, 436);
    assert_eq!(receipt.transaction_hash, TX);
}

#[tokio::test]
async fn reverted_transaction_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(rpc_result(json!({
            "transactionHash": TX,
            "blockNumber": "0x2",
            "status": "0x0"
        })))
        .mount(&server)
        .await;

    let err = test_ledger(&server).receipt(&TxHandle(TX.into())).await.unwrap_err();
    assert!(matches!(err, LedgerError::Rejected(msg) if msg.contains("reverted")));
}

#[tokio::test]
async fn http_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_ledger(&server).receipt(&TxHandle(TX.into())).await.unwrap_err();
    assert!(matches!(err, LedgerError::Transport(_)));
}
