#[cfg(not(unix))]
compile_error!(
    "\
pathsock is built around Unix-domain sockets and only supports Unix-like targets – compilation \
for other platforms was attempted, likely because of a missing `cfg(unix)` somewhere in the \
downstream crate"
);
