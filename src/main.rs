/// Binary entrypoint for the `codecopy` executable.
///
/// Keeps the binary thin — all logic lives in the `codecopy_lib` crate so
/// tests can import library functions directly.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codecopy_lib::run().await
}
