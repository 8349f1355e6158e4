fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Client only; the gateway itself lives elsewhere.
    tonic_build::configure()
        .build_server(false)
        .compile_protos(&["proto/gateway.proto"], &["proto"])?;
    Ok(())
}
