//! Command dispatch over directory-backed stores.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{Value, json};
use sluice_history::ComposerHistory;
use sluice_rpc::{ChangeTracker, MethodRegistry, RpcContext, RpcRequest, register_all};
use sluice_rules::{
    Collaborators, InlineValueMap, NoRemote, RuleInterpreter, RulesService, Stores, SystemHosts,
};
use sluice_settings::RulesSettings;
use sluice_store::FileStorage;

#[derive(Default)]
struct Interpreter {
    last: Mutex<Option<(String, InlineValueMap)>>,
}

impl RuleInterpreter for Interpreter {
    fn load(&self, text: &str, values: &InlineValueMap) {
        *self.last.lock() = Some((text.to_string(), values.clone()));
    }
}

#[derive(Default)]
struct Hosts(Mutex<String>);

impl SystemHosts for Hosts {
    fn get_hosts(&self) -> std::io::Result<String> {
        Ok(self.0.lock().clone())
    }

    fn set_hosts(&self, text: &str) -> std::io::Result<()> {
        *self.0.lock() = text.to_string();
        Ok(())
    }
}

struct Agent {
    registry: MethodRegistry,
    ctx: RpcContext,
    interpreter: Arc<Interpreter>,
    hosts: Arc<Hosts>,
}

fn open(dir: &Path) -> Agent {
    let properties = Arc::new(FileStorage::open(dir.join("properties")).unwrap());
    let interpreter = Arc::new(Interpreter::default());
    let hosts = Arc::new(Hosts::default());
    let rules = Arc::new(RulesService::new(
        RulesSettings {
            shadow_rules: "shadow.test 9.9.9.9".into(),
            ..RulesSettings::default()
        },
        dir.to_path_buf(),
        Stores {
            rules: Arc::new(FileStorage::open(dir.join("rules")).unwrap()),
            values: Arc::new(FileStorage::open(dir.join("values")).unwrap()),
            properties: properties.clone(),
        },
        Collaborators {
            fetcher: Arc::new(NoRemote),
            interpreter: interpreter.clone(),
            hosts: hosts.clone(),
        },
    ));
    let mut registry = MethodRegistry::new();
    register_all(&mut registry);
    Agent {
        registry,
        ctx: RpcContext {
            rules,
            history: ComposerHistory::load(properties, Duration::from_millis(10)),
            changes: Arc::new(ChangeTracker::new()),
            start_time: Instant::now(),
        },
        interpreter,
        hosts,
    }
}

impl Agent {
    async fn call(&self, method: &str, params: Value) -> Value {
        let response = self
            .registry
            .dispatch(
                RpcRequest {
                    id: "t".into(),
                    method: method.into(),
                    params: Some(params),
                },
                &self.ctx,
            )
            .await;
        assert!(response.success, "{method} failed: {:?}", response.error);
        response.result.unwrap()
    }

    fn composed(&self) -> (String, InlineValueMap) {
        self.interpreter.last.lock().clone().unwrap_or_default()
    }
}

#[tokio::test]
async fn selection_feeds_composition() {
    let dir = tempfile::tempdir().unwrap();
    let agent = open(dir.path());

    let _ = agent
        .call(
            "rules.add",
            json!({"name": "dev", "value": "dev.test 1.1.1.1\n```tpl\nhello\n```", "clientId": "ui"}),
        )
        .await;
    let _ = agent.call("rules.select", json!({"name": "dev"})).await;
    let _ = agent.call("rules.setDefault", json!({"value": "d.test 2.2.2.2"})).await;

    let report = agent.call("rules.parseRules", json!({})).await;
    assert_eq!(report["valueKeys"], json!(["tpl"]));

    let (text, values) = agent.composed();
    assert!(text.starts_with("dev.test 1.1.1.1"));
    assert!(text.ends_with("d.test 2.2.2.2\nshadow.test 9.9.9.9"));
    assert!(!text.contains("hello"));
    assert_eq!(values.get("tpl").map(String::as_str), Some("hello"));

    let modified = agent.call("system.getModified", json!({})).await;
    assert_eq!(modified["version"], 2);
    assert_eq!(modified["rulesChanged"], true);
}

#[tokio::test]
async fn back_rules_first_inverts_composition() {
    let dir = tempfile::tempdir().unwrap();
    let agent = open(dir.path());
    let _ = agent.call("rules.add", json!({"name": "a", "value": "a1\na2"})).await;
    let _ = agent.call("rules.select", json!({"name": "a"})).await;
    let _ = agent.call("rules.enableBackRulesFirst", json!({"enabled": true})).await;
    let _ = agent.call("rules.parseRules", json!({})).await;
    let (text, _) = agent.composed();
    assert_eq!(text, "shadow.test 9.9.9.9\na2\r\na1");
}

#[tokio::test]
async fn host_sync_through_properties() {
    let dir = tempfile::tempdir().unwrap();
    let agent = open(dir.path());
    let _ = agent
        .call("properties.set", json!({"name": "syncWithSysHosts", "value": true}))
        .await;
    let _ = agent
        .call("rules.add", json!({"name": "lan", "value": "10.0.0.1 nas.lan"}))
        .await;
    let _ = agent.call("rules.select", json!({"name": "lan"})).await;
    let report = agent.call("rules.parseRules", json!({})).await;
    assert_eq!(report["hostsSynced"], true);
    assert_eq!(*agent.hosts.0.lock(), "#\r\n# lan\r\n#\r\n10.0.0.1 nas.lan");
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let agent = open(dir.path());
        let _ = agent.call("rules.add", json!({"name": "a", "value": "x"})).await;
        let _ = agent.call("rules.add", json!({"name": "b", "value": "y"})).await;
        let _ = agent.call("rules.select", json!({"name": "b"})).await;
        let _ = agent.call("values.add", json!({"name": "v", "value": "1"})).await;
        let _ = agent.call("values.select", json!({"name": "v"})).await;
        let _ = agent
            .call(
                "properties.addHistory",
                json!({"needResponse": true, "url": "https://a.test", "method": "POST", "headers": "", "body": "x"}),
            )
            .await;
        agent.ctx.history.flush();
    }

    let agent = open(dir.path());
    let list = agent.call("rules.list", json!({})).await;
    assert_eq!(list["list"][0]["name"], "a");
    assert_eq!(list["list"][1]["selected"], true);

    let values = agent.call("values.list", json!({})).await;
    assert_eq!(values["list"][0]["selected"], true);

    let history = agent.call("properties.getHistory", json!({})).await;
    assert_eq!(history["list"][0]["method"], "POST");
}

#[tokio::test]
async fn unknown_method_and_bad_params() {
    let dir = tempfile::tempdir().unwrap();
    let agent = open(dir.path());

    let response = agent
        .registry
        .dispatch(
            RpcRequest {
                id: "x".into(),
                method: "rules.nope".into(),
                params: None,
            },
            &agent.ctx,
        )
        .await;
    assert_eq!(response.error.unwrap().code, "METHOD_NOT_FOUND");

    let response = agent
        .registry
        .dispatch(
            RpcRequest {
                id: "y".into(),
                method: "rules.get".into(),
                params: None,
            },
            &agent.ctx,
        )
        .await;
    assert!(!response.success);
    assert_eq!(response.id, "y");
    assert_eq!(response.error.unwrap().code, "INVALID_PARAMS");
}
