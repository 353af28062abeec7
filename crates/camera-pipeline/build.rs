fn main() {
    // The PoE link binds the vendor SDK; plain builds run on the mock link
    // and need no native library.
    if std::env::var_os("CARGO_FEATURE_POE_DEVICE").is_some() {
        println!("cargo:rustc-link-lib=dylib=depthai-core");
    }
}
