//! Header → library lookup table.
//!
//! Matching is plain substring search over each live source line, in table
//! order. Several rules may map to the same flag (`winsock.h` and
//! `winsock2.h`); the scanner deduplicates per flag, so the first rule that
//! fires wins the position of that flag in the output.

/// One entry of the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLibraryRule {
    /// Text searched for on each uncommented line.
    pub header: &'static str,
    /// Linker flags emitted when `header` is seen.
    pub flags: &'static [&'static str],
}

const fn rule(header: &'static str, flags: &'static [&'static str]) -> HeaderLibraryRule {
    HeaderLibraryRule { header, flags }
}

#[cfg(windows)]
pub const HEADER_RULES: &[HeaderLibraryRule] = &[
    rule(
        "windows.h",
        &[
            "-lkernel32",
            "-luser32",
            "-lshell32",
            "-lgdi32",
            "-lwinspool",
            "-lcomdlg32",
            "-ladvapi32",
        ],
    ),
    rule("winsock2.h", &["-lws2_32"]),
    rule("winsock.h", &["-lws2_32"]),
    rule("shlobj.h", &["-lole32"]),
    rule("ole32.h", &["-lole32"]),
    rule("dwmapi.h", &["-ldwmapi"]),
    rule("wininet.h", &["-lwininet"]),
    rule("comctl32.h", &["-lcomctl32"]),
    rule("commctrl.h", &["-lcomctl32"]),
    rule("version.h", &["-lversion"]),
    rule("winver.h", &["-lversion"]),
    rule("rpc.h", &["-lrpcrt4"]),
    rule("bcrypt.h", &["-lbcrypt"]),
    rule("ncrypt.h", &["-lncrypt"]),
    rule("d3d11.h", &["-ld3d11"]),
    rule("d2d1.h", &["-ld2d1"]),
    rule("dwrite.h", &["-ldwrite"]),
    rule("pthread.h", &["-lpthread"]),
    rule("math.h", &["-lm"]),
];

#[cfg(not(windows))]
pub const HEADER_RULES: &[HeaderLibraryRule] = &[
    rule("pthread.h", &["-lpthread"]),
    rule("math.h", &["-lm"]),
    rule("dlfcn.h", &["-ldl"]),
    rule("mqueue.h", &["-lrt"]),
    rule("curses.h", &["-lncurses"]),
    rule("zlib.h", &["-lz"]),
];

/// Headers looked for in `-MM` output when a source file could not be read.
pub const FALLBACK_RULES: &[HeaderLibraryRule] = &[
    rule("pthread.h", &["-lpthread"]),
    rule("math.h", &["-lm"]),
];
