use thiserror::Error;

/// Failures of a single fetch attempt or of configuration input.
/// `Display` is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Não foi possível conectar à API. Verifique se o servidor está rodando.")]
    Transport(String),

    #[error("Erro HTTP {0}")]
    HttpStatus(u16),

    #[error("API retornou HTML em vez de JSON. Verifique se o servidor está rodando.")]
    HtmlResponse,

    #[error("Resposta da API não é um JSON válido ({0}). Verifique a configuração do servidor.")]
    InvalidJson(String),

    #[error("URL base inválida: {0}")]
    InvalidBaseUrl(String),

    #[error("URL do painel inválida: {0}")]
    InvalidDashboardUrl(String),
}

impl DashboardError {
    /// Short machine-friendly tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::Transport(_) => "transport",
            DashboardError::HttpStatus(_) => "http_status",
            DashboardError::HtmlResponse => "html_response",
            DashboardError::InvalidJson(_) => "invalid_json",
            DashboardError::InvalidBaseUrl(_) => "invalid_base_url",
            DashboardError::InvalidDashboardUrl(_) => "invalid_dashboard_url",
        }
    }
}
