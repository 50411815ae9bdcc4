//! `HostPage` over any JavaScript evaluation backend.
//!
//! A webview, a DevTools session or a WebDriver client only needs to evaluate
//! an expression and hand back its JSON value. Every DOM interaction the core
//! performs is expressed as one self-contained expression built from
//! [`HostSelectors`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::host::{HostControl, HostError, HostPage, HostSelectors};
use crate::status::DomSignals;

const EMPTY_PARAGRAPH_HTML: &str = "<p><br></p>";

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn eval(&self, script: String) -> Result<Value, HostError>;
}

pub struct ScriptHost<R: ScriptRunner> {
    runner: R,
    selectors: HostSelectors,
}

impl<R: ScriptRunner> ScriptHost<R> {
    pub fn new(runner: R, selectors: HostSelectors) -> Self {
        Self {
            runner,
            selectors: selectors.normalized(),
        }
    }

    pub fn selectors(&self) -> &HostSelectors {
        &self.selectors
    }

    async fn eval_as<T: DeserializeOwned>(&self, script: String) -> Result<T, HostError> {
        let value = self.runner.eval(script).await?;
        serde_json::from_value(value).map_err(|err| HostError::Decode(err.to_string()))
    }

    /// Runs a composer mutation; the script yields `false` when the composer
    /// has disappeared.
    async fn mutate_composer(&self, action: &'static str, body: &str) -> Result<(), HostError> {
        let script = composer_script(&self.selectors.composer, body);
        let applied: bool = self.eval_as(script).await?;
        if applied {
            Ok(())
        } else {
            debug!(action, "composer missing during mutation");
            Err(HostError::Unavailable)
        }
    }
}

#[async_trait]
impl<R: ScriptRunner> HostPage for ScriptHost<R> {
    async fn read_signals(&self) -> Result<DomSignals, HostError> {
        self.eval_as(signals_script(&self.selectors)).await
    }

    async fn read_composer_text(&self) -> Result<Option<String>, HostError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({composer}); \
             if (!el) return null; \
             return el.innerText ?? el.textContent ?? \"\"; }})()",
            composer = js_literal(&self.selectors.composer),
        );
        self.eval_as(script).await
    }

    async fn click(&self, control: HostControl) -> Result<bool, HostError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({selector}); \
             if (!el) return false; \
             el.click(); return true; }})()",
            selector = js_literal(self.selectors.control(control)),
        );
        self.eval_as(script).await
    }

    async fn focus_composer(&self) -> Result<(), HostError> {
        self.mutate_composer("focus", "el.focus();").await
    }

    async fn select_all_and_delete(&self) -> Result<(), HostError> {
        self.mutate_composer(
            "select_all_and_delete",
            "el.focus(); document.execCommand(\"selectAll\", false); \
             document.execCommand(\"delete\", false);",
        )
        .await
    }

    async fn reset_composer(&self) -> Result<(), HostError> {
        let body = format!("el.innerHTML = {};", js_literal(EMPTY_PARAGRAPH_HTML));
        self.mutate_composer("reset", &body).await
    }

    async fn dispatch_input_events(&self) -> Result<(), HostError> {
        self.mutate_composer(
            "dispatch_input_events",
            "el.dispatchEvent(new InputEvent(\"input\", { bubbles: true, inputType: \"deleteContentBackward\" })); \
             el.dispatchEvent(new Event(\"change\", { bubbles: true }));",
        )
        .await
    }
}

fn js_literal(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn composer_script(composer: &str, body: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({composer}); \
         if (!el) return false; \
         {body} return true; }})()",
        composer = js_literal(composer),
    )
}

fn signals_script(selectors: &HostSelectors) -> String {
    format!(
        "(() => {{ \
         const find = (selector) => (selector ? document.querySelector(selector) : null); \
         const visible = (el) => !!el && el.getClientRects().length > 0; \
         const composer = find({composer}); \
         const start = find({start}); \
         const stop = find({stop}); \
         const submit = find({submit}); \
         return {{ \
           composerPresent: !!composer, \
           composerVisible: visible(composer), \
           startPresent: !!start, \
           stopPresent: !!stop, \
           submitPresent: !!submit, \
           controlsDisabled: !!find({busy}) || [stop, submit].some((el) => !!el && el.disabled), \
           activityActive: visible(find({activity})) \
         }}; }})()",
        composer = js_literal(&selectors.composer),
        start = js_literal(&selectors.start_button),
        stop = js_literal(&selectors.stop_button),
        submit = js_literal(&selectors.submit_button),
        busy = js_literal(&selectors.busy_indicator),
        activity = js_literal(&selectors.activity_indicator),
    )
}
