use std::env;

// libsoc is expected to be installed on the target system, usually as /usr/lib/libsoc.so. Point
// LIBSOC_LIB_DIR at a different directory when cross compiling against a sysroot.

fn main() {
    println!("cargo:rerun-if-env-changed=LIBSOC_LIB_DIR");
    if env::var("CARGO_FEATURE_CI").is_ok() {
        return;
    }

    if let Ok(lib_dir) = env::var("LIBSOC_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", lib_dir);
    }
    println!("cargo:rustc-link-lib=dylib=soc");
}
