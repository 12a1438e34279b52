//! Demo dialogue used by the `parley` binary
//!
//! A coffee-bar order: the root script loops over a `choose_drink` sub-script
//! until the customer is done. The menu comes from the scope, so two commands
//! are DI-bound.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use crate::errors::ScriptError;
use crate::inject::{callback_fn, Callback, ServiceScope};
use crate::script::{Command, ExecutionContext, Script};

pub const ROOT_SCRIPT: &str = "take_order";

/// Drinks on offer
#[derive(Debug, Clone)]
pub struct Menu {
    pub items: Vec<String>,
}

impl Menu {
    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self {
            items: vec!["latte".into(), "mocha".into(), "tea".into()],
        }
    }
}

pub fn demo_scope(menu: Menu) -> ServiceScope {
    ServiceScope::new().with_service("menu", menu)
}

/// Prompt input as plain text
fn input_text(input: Option<JsonValue>) -> String {
    match input {
        Some(JsonValue::String(s)) => s.trim().to_lowercase(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn var_str<'c>(ctx: &'c ExecutionContext, name: &str) -> &'c str {
    ctx.vars.get(name).and_then(JsonValue::as_str).unwrap_or("")
}

fn with_var(mut vars: JsonValue, name: &str, value: JsonValue) -> JsonValue {
    if !vars.is_object() {
        vars = json!({});
    }
    vars[name] = value;
    vars
}

pub fn choose_drink() -> Result<Arc<Script>, ScriptError> {
    Script::builder("choose_drink")
        .command(Command::content(Callback::injected(["menu"], |deps| {
            let menu = deps.get::<Menu>(0)?;
            Ok(callback_fn(move |_| {
                Ok(json!(format!(
                    "We have: {}. What would you like?",
                    menu.items.join(", ")
                )))
            }))
        })))
        .command(Command::prompt(
            "drink",
            Some(Callback::from_fn(|(ctx, input): (ExecutionContext, _)| {
                Ok(with_var(ctx.vars, "choice", json!(input_text(input))))
            })),
        ))
        .command(Command::jump_if(
            Callback::injected(["menu"], |deps| {
                let menu = deps.get::<Menu>(0)?;
                Ok(callback_fn(move |ctx: ExecutionContext| {
                    Ok(menu.contains(var_str(&ctx, "choice")))
                }))
            }),
            3,
        ))
        .command(Command::content(Callback::from_fn(|ctx: ExecutionContext| {
            Ok(json!(format!("Sorry, we don't serve {}.", var_str(&ctx, "choice"))))
        })))
        .command(Command::jump(-4))
        .command(Command::ret(Some(Callback::from_fn(|ctx: ExecutionContext| {
            Ok(json!({ "drink": ctx.vars["choice"] }))
        }))))
        .build()
}

pub fn take_order() -> Result<Arc<Script>, ScriptError> {
    Script::builder(ROOT_SCRIPT)
        .init_vars(|_| json!({ "orders": [] }))
        .meta(json!({ "shop": "parley coffee" }))
        .command(Command::content(Callback::from_fn(|ctx: ExecutionContext| {
            Ok(json!(format!("Welcome to {}!", ctx.meta["shop"].as_str().unwrap_or("the shop"))))
        })))
        .command(Command::Call {
            key: "choose".to_string(),
            script: choose_drink()?,
            goto: None,
            with_params: None,
            set_vars: Some(Callback::from_fn(|(ctx, returned): (ExecutionContext, Option<JsonValue>)| {
                let drink = returned
                    .as_ref()
                    .and_then(|r| r.get("drink"))
                    .cloned()
                    .unwrap_or(JsonValue::Null);

                let mut orders = ctx.vars["orders"].as_array().cloned().unwrap_or_default();
                orders.push(drink.clone());

                let vars = with_var(ctx.vars, "orders", JsonValue::Array(orders));
                Ok(with_var(vars, "last", drink))
            })),
        })
        .command(Command::effect(
            None,
            Some(Callback::from_fn(|(ctx, previous): (ExecutionContext, Option<JsonValue>)| {
                let count = previous
                    .as_ref()
                    .and_then(|p| p["ordered"].as_u64())
                    .unwrap_or(0);
                let mut drinks = vec![ctx.vars["last"].clone()];
                if let Some(rest) = previous.as_ref().and_then(|p| p["drinks"].as_array()) {
                    drinks.extend(rest.iter().cloned());
                }
                Ok(json!({ "ordered": count + 1, "drinks": drinks }))
            })),
        ))
        .command(Command::content(Callback::from_fn(|ctx: ExecutionContext| {
            Ok(json!(format!("One {} coming up! Anything else? (yes/no)", var_str(&ctx, "last"))))
        })))
        .command(Command::prompt(
            "more",
            Some(Callback::from_fn(|(ctx, input): (ExecutionContext, _)| {
                let more = matches!(input_text(input).as_str(), "yes" | "y");
                Ok(with_var(ctx.vars, "more", json!(more)))
            })),
        ))
        .command(Command::jump_if(
            Callback::from_fn(|ctx: ExecutionContext| Ok(ctx.vars["more"] == json!(true))),
            -4,
        ))
        .command(Command::content(Callback::from_fn(|ctx: ExecutionContext| {
            let orders = ctx.vars["orders"]
                .as_array()
                .map(|o| {
                    o.iter()
                        .filter_map(JsonValue::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            Ok(json!(format!("Thanks! Your order: {}.", orders)))
        })))
        .command(Command::ret(Some(Callback::from_fn(|ctx: ExecutionContext| {
            Ok(json!({ "orders": ctx.vars["orders"] }))
        }))))
        .build()
}
