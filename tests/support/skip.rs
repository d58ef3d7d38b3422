/// Skip a test when running as root.
///
/// As root berry chroots into the install directory, which the local test
/// store cannot follow.
#[macro_export]
macro_rules! skip_as_root {
    () => {
        #[cfg(unix)]
        if nix::unistd::Uid::effective().is_root() {
            eprintln!("SKIPPED: running as root");
            return;
        }
    };
}
