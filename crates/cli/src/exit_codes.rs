//! CLI Exit Code Registry
//!
//! Single source of truth for `sheetfill` exit codes. Scripts rely on them.
//!
//! | Code  | Meaning                                               |
//! |-------|-------------------------------------------------------|
//! | 0     | Success                                               |
//! | 1     | General error                                         |
//! | 2     | Usage error (bad arguments, conflicting options)      |
//! | 3     | I/O error (cannot read input, cannot write output)    |
//! | 4     | Parse error (template, data items or config)          |
//! | 50    | Template fetch: server answered non-2xx               |
//! | 51    | Template fetch: network failure or bad URL            |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or conflicting options.
pub const EXIT_USAGE: u8 = 2;

/// Reading an input file or writing an output file failed.
pub const EXIT_IO: u8 = 3;

/// Template, data items or config could not be parsed.
pub const EXIT_PARSE: u8 = 4;

/// Template URL returned a non-2xx status.
pub const EXIT_FETCH_HTTP: u8 = 50;

/// Template URL could not be reached or is invalid.
pub const EXIT_FETCH_NETWORK: u8 = 51;

/// Map a fetch error to its exit code.
pub fn fetch_exit_code(err: &sheetfill_fetch::FetchError) -> u8 {
    use sheetfill_fetch::FetchError;
    match err {
        FetchError::Http { .. } => EXIT_FETCH_HTTP,
        FetchError::Network(_) | FetchError::InvalidUrl { .. } => EXIT_FETCH_NETWORK,
    }
}

/// Map a populate error to its exit code.
pub fn populate_exit_code(err: &sheetfill_populate::PopulateError) -> u8 {
    use sheetfill_populate::PopulateError;
    match err {
        PopulateError::ConfigParse(_)
        | PopulateError::ConfigValidation(_)
        | PopulateError::ItemsParse(_)
        | PopulateError::Workbook(_) => EXIT_PARSE,
    }
}
