#[actix_web::main]
async fn main() -> std::io::Result<()> {
    sls_certificates::run().await
}
