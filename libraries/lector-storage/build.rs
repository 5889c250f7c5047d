//! Rebuilds lector-storage when the embedded `kv_store` schema changes.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
