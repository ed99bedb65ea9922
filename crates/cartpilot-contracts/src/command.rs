//! Automation command AST.
//!
//! Scripts are plain data: the host never executes them. The page-side
//! interpreter honours the following contract for each command:
//!
//! - `if` / `while` evaluate their [`Condition`] before running `do` (or `else`).
//! - `iterate-over-codes` runs its body once per active promo code.
//! - `return` unwinds `level` enclosing script frames.
//! - `anchor` records its name and stage into the
//!   [`ExecutionContext`](crate::ExecutionContext) so a reloaded page continues
//!   past completed anchors instead of starting over.
//! - `wait` blocks until one of the expected responses appears or `timeout`
//!   milliseconds elapse, whichever comes first.
//! - `extract` reads text from `selector`, optionally cuts it between edge
//!   markers and stores the result under `target`.
//!
//! On the wire every command except `anchor` is tagged with the page
//! interpreter's spelling (`command_if`, `iteration_codes`, ...), the same
//! text the config service sends. The short names are accepted on decode.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::selector::Selector;

/// An ordered command sequence.
pub type Script = Vec<Command>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "command_if", alias = "if")]
    If {
        condition: Condition,
        #[serde(rename = "do")]
        then: Script,
        #[serde(rename = "else", default)]
        otherwise: Script,
    },
    #[serde(rename = "command_while", alias = "while")]
    While {
        condition: Condition,
        #[serde(rename = "do")]
        body: Script,
    },
    #[serde(rename = "iteration_codes", alias = "iterate-over-codes")]
    IterateOverCodes {
        #[serde(rename = "do")]
        body: Script,
    },
    #[serde(rename = "anchor")]
    Anchor {
        anchor: String,
        /// Pipeline stage the anchor belongs to (`inspect`, `apply`, ...).
        place: String,
    },
    #[serde(rename = "command_wait", alias = "wait")]
    Wait {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<Vec<InteractResponse>>,
        timeout: u64,
    },
    #[serde(rename = "command_insert", alias = "insert")]
    Insert {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<Selector>,
        /// Literal to type; the current promo code when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    #[serde(rename = "command_apply", alias = "apply-action")]
    ApplyAction { action: InteractAction },
    #[serde(rename = "command_interact", alias = "interact")]
    Interact {
        action: InteractAction,
        response: Vec<InteractResponse>,
        timeout: u64,
    },
    #[serde(rename = "command_return", alias = "return")]
    Return { level: u32 },
    #[serde(rename = "command_extract", alias = "extract")]
    Extract {
        selector: Selector,
        format: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cut: Option<ExtractCut>,
        #[serde(
            rename = "codeIsValid",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        code_is_valid: Option<bool>,
    },
    #[serde(rename = "command_store", alias = "store")]
    Store { target: String },
}

/// A DOM interaction performed by `apply-action` and `interact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub selector: Selector,
}

/// A DOM reaction awaited by `wait` and `interact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub selector: Selector,
}

/// Trims extracted text to the part between `left_edge` and `right_edge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractCut {
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_edge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_edge: Option<String>,
}

impl Command {
    /// Short name of this command, as used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::If { .. } => "if",
            Self::While { .. } => "while",
            Self::IterateOverCodes { .. } => "iterate-over-codes",
            Self::Anchor { .. } => "anchor",
            Self::Wait { .. } => "wait",
            Self::Insert { .. } => "insert",
            Self::ApplyAction { .. } => "apply-action",
            Self::Interact { .. } => "interact",
            Self::Return { .. } => "return",
            Self::Extract { .. } => "extract",
            Self::Store { .. } => "store",
        }
    }

    /// Nested command sequences owned by this command.
    pub fn children(&self) -> Vec<&Script> {
        match self {
            Self::If {
                then, otherwise, ..
            } => vec![then, otherwise],
            Self::While { body, .. } | Self::IterateOverCodes { body } => vec![body],
            _ => Vec::new(),
        }
    }
}

/// Maximum nesting depth of a script. An empty script has depth 0.
pub fn script_depth(script: &[Command]) -> usize {
    script
        .iter()
        .map(|command| {
            1 + command
                .children()
                .into_iter()
                .map(|child| script_depth(child))
                .max()
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
}

/// Names of every anchor in the script, in document order.
pub fn anchors(script: &[Command]) -> Vec<&str> {
    let mut names = Vec::new();
    collect_anchors(script, &mut names);
    names
}

fn collect_anchors<'a>(script: &'a [Command], names: &mut Vec<&'a str>) {
    for command in script {
        if let Command::Anchor { anchor, .. } = command {
            names.push(anchor.as_str());
        }
        for child in command.children() {
            collect_anchors(child, names);
        }
    }
}
