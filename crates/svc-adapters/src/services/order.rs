//! `PlaceOrder`: reserva stock y cobra al cliente dentro de una transacción
//! del ledger; después notifica mediante el servicio hijo
//! `SendNotification`.
//!
//! Un fallo de notificación se registra como error con `rollback(false)`: el
//! pedido no tiene éxito, pero los movimientos ya hechos se conservan.

use std::sync::Arc;

use svc_core::{CopyOptions, DefinitionError, FieldSpec, ServiceDefinition, ServiceError, StepSpec, TypeConstraint};

use crate::ledger::InMemoryLedger;

/// Precio unitario por SKU.
const CATALOG: &[(&str, i64)] = &[("apple", 3), ("pear", 4), ("melon", 9)];

/// Dominio de correo que simula un buzón que rebota.
pub const BOUNCING_DOMAIN: &str = "@bounce.test";

fn unit_price(sku: &str) -> Option<i64> {
    CATALOG.iter().find(|(s, _)| *s == sku).map(|(_, p)| *p)
}

pub fn send_notification() -> Result<Arc<ServiceDefinition>, DefinitionError> {
    ServiceDefinition::builder("SendNotification").argument(FieldSpec::argument("customer").typed(TypeConstraint::String))
                                                  .argument(FieldSpec::argument("text").typed(TypeConstraint::String))
                                                  .output(FieldSpec::output("delivered").typed(TypeConstraint::Bool).default(false))
                                                  .step(StepSpec::new("deliver", |ctx| {
                                                      let customer: String = ctx.arg_as("customer")?;
                                                      if customer.ends_with(BOUNCING_DOMAIN) {
                                                          return ctx.add_error("text", format!("could not deliver to {customer}"));
                                                      }
                                                      ctx.set_output("delivered", true)
                                                  }))
                                                  .build()
}

pub fn place_order(ledger: &InMemoryLedger, notifier: Arc<ServiceDefinition>) -> Result<Arc<ServiceDefinition>, DefinitionError> {
    let reserve_ledger = ledger.clone();
    let charge_ledger = ledger.clone();
    ServiceDefinition::builder("PlaceOrder").argument(FieldSpec::argument("customer").typed(TypeConstraint::String).context())
                                            .argument(FieldSpec::argument("sku").typed(TypeConstraint::String))
                                            .argument(FieldSpec::argument("quantity").typed(TypeConstraint::Integer).default(1))
                                            .argument(FieldSpec::argument("notify").typed(TypeConstraint::Bool).default(true))
                                            .output(FieldSpec::output("total").typed(TypeConstraint::Integer))
                                            .output(FieldSpec::output("order_id").typed(TypeConstraint::String))
                                            .transactions(Arc::new(ledger.clone()))
                                            .step(StepSpec::new("validate", |ctx| {
                                                if ctx.arg_as::<i64>("quantity")? <= 0 {
                                                    ctx.add_error("quantity", "must be positive")?;
                                                }
                                                let sku: String = ctx.arg_as("sku")?;
                                                if unit_price(&sku).is_none() {
                                                    ctx.add_error("sku", format!("unknown sku `{sku}`"))?;
                                                }
                                                Ok(())
                                            }))
                                            .step(StepSpec::new("reserve_stock", move |ctx| {
                                                let sku: String = ctx.arg_as("sku")?;
                                                let quantity: i64 = ctx.arg_as("quantity")?;
                                                reserve_ledger.record(format!("stock:{sku}"), -quantity);
                                                Ok(())
                                            }))
                                            .step(StepSpec::new("charge", move |ctx| {
                                                let sku: String = ctx.arg_as("sku")?;
                                                let quantity: i64 = ctx.arg_as("quantity")?;
                                                let customer: String = ctx.arg_as("customer")?;
                                                let price = unit_price(&sku).ok_or_else(|| ServiceError::step(format!("no price for {sku}")))?;
                                                let total = price * quantity;
                                                charge_ledger.record(format!("customer:{customer}"), -total);
                                                ctx.set_output("total", total)?;
                                                let order_id = format!("ord-{}", ctx.invocation_id().simple());
                                                ctx.set_output("order_id", order_id)
                                            }))
                                            .step(StepSpec::new("notify", move |ctx| {
                                                let total = ctx.output("total").cloned().unwrap_or_default();
                                                let text = format!("order confirmed, total {total}");
                                                let sent = ctx.call(&notifier).load_errors(false).run(serde_json::json!({ "text": text }))?;
                                                if sent.failed() {
                                                    ctx.errors_mut().copy_from(sent.errors(), CopyOptions::new().rollback(false))?;
                                                }
                                                Ok(())
                                            }).when("notify"))
                                            .build()
}
