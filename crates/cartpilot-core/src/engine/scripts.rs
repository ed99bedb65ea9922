//! Stage scripts evaluated in the page.

use crate::bridge::BRIDGE_HANDLER;

/// Host-triggered steps of the page-side engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Create the page engine once and forward its events to the host.
    InitEngine,
    Inspect,
    Detect,
    Apply,
    ApplyBest,
    /// Inspect, apply and apply-best in one go.
    FullCycle,
    NotifyShowModal,
    NotifyCloseModal,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Self::InitEngine,
        Self::Inspect,
        Self::Detect,
        Self::Apply,
        Self::ApplyBest,
        Self::FullCycle,
        Self::NotifyShowModal,
        Self::NotifyCloseModal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InitEngine => "init-engine",
            Self::Inspect => "inspect",
            Self::Detect => "detect",
            Self::Apply => "apply",
            Self::ApplyBest => "apply-best",
            Self::FullCycle => "full-cycle",
            Self::NotifyShowModal => "notify-show-modal",
            Self::NotifyCloseModal => "notify-close-modal",
        }
    }

    pub fn script(self) -> String {
        match self {
            Self::InitEngine => init_engine_script(),
            Self::Inspect => after_load("inspect"),
            Self::Detect => after_load("detect"),
            Self::Apply => "return await cartPilotEngine.apply()".to_string(),
            Self::ApplyBest => "return await cartPilotEngine.applyBest()".to_string(),
            Self::FullCycle => "return await cartPilotEngine.fullCycle()".to_string(),
            Self::NotifyShowModal => "cartPilotEngine.notifyAboutShowModal()".to_string(),
            Self::NotifyCloseModal => "cartPilotEngine.notifyAboutCloseModal()".to_string(),
        }
    }
}

fn init_engine_script() -> String {
    format!(
        r#"if (window && !window.cartPilotEngine) {{
    window.cartPilotEngine = new CartPilot.Engine();
    const post = (event, message) =>
        window.webkit.messageHandlers[{handler:?}].postMessage(JSON.stringify({{ event, message }}));
    cartPilotEngine.subscribe({{
        config: (value) => post("config", value),
        checkoutState: (value) => post("checkoutState", value),
        finalCost: (value) => post("finalCost", value),
        promocodes: (value) => post("promocodes", value),
        progress: (value, state) => post("progress", {{ value, state }}),
        currentCode: (value) => post("currentCode", value),
        bestCode: (value) => post("bestCode", value),
        detectState: (value) => post("detectState", value),
        checkout: (value, state) => post("checkout", {{ value, state }}),
    }});
}}"#,
        handler = BRIDGE_HANDLER,
    )
}

/// Run `cartPilotEngine.<method>()` once the document has loaded.
fn after_load(method: &str) -> String {
    format!(
        r#"if (document.readyState === 'complete') {{
    cartPilotEngine.{method}();
}} else {{
    window.addEventListener('load', () => cartPilotEngine.{method}(), {{ once: true }});
}}"#
    )
}
