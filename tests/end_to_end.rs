//! Real server on a local port, forwarding to a mock TCP backend.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use admission_gateway::config::{ClusterConfig, RouteConfig};
use admission_gateway::{GatewayServer, Shutdown};
use tokio::net::TcpListener;

use common::{start_echo_backend, test_config, VALID_TOKEN};

#[tokio::test]
async fn test_forwarding_through_real_server() {
    let (backend_addr, backend_hits) = start_echo_backend().await;

    let mut config = test_config();
    config.clusters.push(ClusterConfig {
        id: "api".to_string(),
        destinations: vec![backend_addr.to_string()],
        max_connections: 10,
        load_balancing: Default::default(),
    });
    config.routes.push(RouteConfig {
        id: "api-route".to_string(),
        cluster: "api".to_string(),
        path_prefix: "/api".to_string(),
        methods: Vec::new(),
        priority: 0,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gateway_addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = tokio::spawn(GatewayServer::new(config).run(listener, shutdown.clone()));

    let client = reqwest::Client::new();
    let base = format!("http://{gateway_addr}");

    // Authenticated request reaches the backend with the subject stamped
    // and the client's own value dropped.
    let res = client
        .get(format!("{base}/api/orders?page=1"))
        .bearer_auth(VALID_TOKEN)
        .header("x-gateway-subject", "mallory")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    let echoed = res.text().await.unwrap();
    assert!(echoed.starts_with("GET /api/orders?page=1 HTTP/1.1"));
    assert!(echoed.contains("x-gateway-subject: alice"));
    assert!(!echoed.contains("mallory"));

    // Rejected before forwarding.
    let res = client
        .get(format!("{base}/api/orders?id=1%20UNION%20SELECT%20password%20FROM%20users"))
        .bearer_auth(VALID_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client.get(format!("{base}/api/orders")).send().await.unwrap();
    assert_eq!(res.status(), 401);

    // No route for this path.
    let res = client
        .get(format!("{base}/other"))
        .bearer_auth(VALID_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    assert_eq!(backend_hits.load(Ordering::SeqCst), 1);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_destination_is_bad_gateway() {
    // Grab a free port, then release it so nothing listens there.
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

    let mut config = test_config();
    config.clusters.push(ClusterConfig {
        id: "down".to_string(),
        destinations: vec![unused.to_string()],
        max_connections: 10,
        load_balancing: Default::default(),
    });
    config.routes.push(RouteConfig {
        id: "down-route".to_string(),
        cluster: "down".to_string(),
        path_prefix: "/api".to_string(),
        methods: Vec::new(),
        priority: 0,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gateway_addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = tokio::spawn(GatewayServer::new(config).run(listener, shutdown.clone()));

    let res = reqwest::Client::new()
        .get(format!("http://{gateway_addr}/api/orders"))
        .bearer_auth(VALID_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
}
