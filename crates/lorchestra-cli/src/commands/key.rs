use crate::support::{parse_object_or_exit, print_json_or_exit};
use lorchestra_core::{WAL_APPEND, idempotency_key, identity_fields};
use serde_json::json;

pub fn run(item: String, method: String, json_output: bool) {
    let item = parse_object_or_exit("item", &item);
    let key = idempotency_key(&method, &item);
    let attached = method == WAL_APPEND;

    if json_output {
        print_json_or_exit(
            "key",
            &json!({
                "method": method,
                "idempotency_key": key.key,
                "identity_source": key.source.as_str(),
                "identity": identity_fields(&item),
                "attached_to_ops": attached,
            }),
        );
        return;
    }

    println!("lorchestra key");
    println!("  Method: {method}");
    println!("  Key: {}", key.key);
    println!("  Identity source: {}", key.source.as_str());
    if !attached {
        println!("  Note: only {WAL_APPEND} ops carry this key in a plan");
    }
}
