/// Marker that precedes the socket directory in `screen -ls` output
const SOCKET_MARKER: &str = " Socket";

/// Extract the socket directory from `screen -ls` output.
///
/// The listing ends with a line like `1 Socket in /run/screen/S-user.`; the
/// directory is everything from the first `/` after the marker up to the last
/// `.` on that line.
pub fn extract_socket_dir(listing: &str) -> Option<String> {
    let marker = listing.find(SOCKET_MARKER)?;
    let rest = &listing[marker + SOCKET_MARKER.len()..];

    let start = rest.find('/')?;
    let rest = &rest[start..];

    let end = rest.find('\n')?;
    let record = &rest[..end];

    let dot = record.rfind('.')?;
    non_null(&record[..dot])
}

/// Extract the socket path from a tmux session descriptor.
///
/// `$TMUX` looks like `/tmp/tmux-1000/default,1234,0`: the socket path
/// followed by the server pid and session index.
pub fn extract_tmux_socket(descriptor: &str) -> Option<String> {
    let (rest, _session) = descriptor.rsplit_once(',')?;
    let (path, _pid) = rest.rsplit_once(',')?;
    non_null(path)
}

fn non_null(path: &str) -> Option<String> {
    if path.contains('\0') {
        None
    } else {
        Some(path.to_string())
    }
}
