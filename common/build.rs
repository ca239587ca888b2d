// Service stubs are generated from the prost messages in `src/rpc.rs`,
// so building does not require `protoc` to be installed.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let method = |name: &str, route: &str, input: &str, output: &str| {
        tonic_build::manual::Method::builder()
            .name(name)
            .route_name(route)
            .input_type(format!("crate::rpc::{}", input))
            .output_type(format!("crate::rpc::{}", output))
            .codec_path("tonic::codec::ProstCodec")
            .build()
    };

    let coordinator = tonic_build::manual::Service::builder()
        .name("Coordinator")
        .package("coordinator")
        .method(method("assignment", "Assignment", "AssignmentRequest", "AssignmentReply"))
        .method(method("done_map", "DoneMap", "DoneRequest", "DoneReply"))
        .method(method("done_reduce", "DoneReduce", "DoneRequest", "DoneReply"))
        .method(method("status", "Status", "StatusRequest", "StatusReply"))
        .build();

    tonic_build::manual::Builder::new().compile(&[coordinator]);

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
