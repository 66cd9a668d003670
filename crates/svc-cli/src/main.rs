use serde_json::Value;
use svc_adapters::{demo_registry, InMemoryLedger};
use svc_core::ServiceError;

const USAGE: &str = "uso: svc run <servicio> '<json>' | svc list";

fn main() {
    // Cargar .env si existe (variables SVCFLOW_*)
    let _ = dotenvy::dotenv();
    svc_core::config::init_dotenv();

    let args: Vec<String> = std::env::args().collect();
    let ledger = InMemoryLedger::new();
    let registry = match demo_registry(&ledger) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[svc] registro inválido: {e}");
            std::process::exit(5);
        }
    };

    match args.get(1).map(String::as_str) {
        Some("list") => {
            for name in registry.names() {
                println!("{name}");
            }
        }
        Some("run") => {
            let Some(service) = args.get(2) else {
                eprintln!("{USAGE}");
                std::process::exit(2);
            };
            let raw: Value = match args.get(3).map(|s| serde_json::from_str(s)).unwrap_or(Ok(Value::Object(Default::default()))) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("[svc] json inválido: {e}");
                    std::process::exit(2);
                }
            };
            match registry.run(service, raw) {
                Ok(result) => {
                    match serde_json::to_string_pretty(&result) {
                        Ok(out) => println!("{out}"),
                        Err(e) => {
                            eprintln!("[svc] no se pudo serializar el resultado: {e}");
                            std::process::exit(5);
                        }
                    }
                    if !ledger.is_empty() {
                        eprintln!("[svc] ledger: {:?}", ledger.balances());
                    }
                    std::process::exit(if result.succeeded() { 0 } else { 1 });
                }
                Err(ServiceError::UnknownService(name)) => {
                    eprintln!("[svc] servicio desconocido: {name} (disponibles: {})", registry.names().join(", "));
                    std::process::exit(4);
                }
                Err(e) => {
                    eprintln!("[svc] error: {e}");
                    std::process::exit(3);
                }
            }
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}
