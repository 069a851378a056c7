fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile the composition function protocol
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        // BTreeMap keeps encoded maps in a stable order
        .btree_map(["."])
        .compile_protos(&["proto/run_function.proto"], &["proto"])?;

    // Re-run if proto files change
    println!("cargo:rerun-if-changed=proto/run_function.proto");

    Ok(())
}
