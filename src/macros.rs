/// File path of a request or notification that carries `text_document`.
#[macro_export]
macro_rules! params_path {
    ($params:expr) => {{
        let uri = &$params.text_document.uri;
        uri.to_file_path().map_err(|_| {
            tower_lsp::jsonrpc::Error::invalid_params(format!("not a file URI: {uri}"))
        })
    }};
}

/// Cursor position and file path of a `TextDocumentPositionParams`.
#[macro_export]
macro_rules! params_position_path {
    ($params:expr) => {{
        let position = $params.position;
        let uri = &$params.text_document.uri;
        uri.to_file_path()
            .map(|path| (position, path))
            .map_err(|_| {
                tower_lsp::jsonrpc::Error::invalid_params(format!("not a file URI: {uri}"))
            })
    }};
}
