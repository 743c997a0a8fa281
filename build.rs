fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/letsplan.proto");

    // protoc is only needed when the gRPC front door is built
    if std::env::var_os("CARGO_FEATURE_SERVER").is_some() {
        tonic_build::compile_protos("proto/letsplan.proto")?;
    }
    Ok(())
}
