// workload-driver: build script, compiles the worker-facing gRPC service.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().compile_protos(&["proto/workload.proto"], &["proto"])?;
    Ok(())
}
