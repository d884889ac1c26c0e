use crate::support::{fail, parse_params_or_exit, print_json_or_exit};
use lorchestra_callable::global;

pub fn run(name: String, params: String, json_output: bool) {
    let params = parse_params_or_exit(&params);
    let result = global().dispatch(&name, &params).unwrap_or_else(|e| fail(e));

    if json_output {
        print_json_or_exit("dispatch", &result.to_value());
        return;
    }

    println!("lorchestra dispatch");
    println!("  Callable: {name}");
    println!("  Schema version: {}", result.schema_version());
    match (result.items(), result.items_ref()) {
        (Some(items), _) => println!("  Items: {}", items.len()),
        (None, Some(items_ref)) => println!("  Items ref: {items_ref}"),
        (None, None) => {}
    }
    if !result.stats().is_empty() {
        let stats: Vec<String> = result
            .stats()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        println!("  Stats: {}", stats.join(", "));
    }
}
