use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage of a contract as reported by the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    FormalizacaoDigital,
    ProtocolarDocumentacao,
    AprovacaoCorban,
    In100,
    Credito,
    FormalizacaoInterna,
    Averbacao,
    LancamentoDoTitulo,
    Pago,
    EmissaoDeCartao,
    IntegracaoDocumental,
    Integrado,
    Cancelado,
    Unidentified,
}

impl Phase {
    pub const KNOWN: [Phase; 13] = [
        Phase::FormalizacaoDigital,
        Phase::ProtocolarDocumentacao,
        Phase::AprovacaoCorban,
        Phase::In100,
        Phase::Credito,
        Phase::FormalizacaoInterna,
        Phase::Averbacao,
        Phase::LancamentoDoTitulo,
        Phase::Pago,
        Phase::EmissaoDeCartao,
        Phase::IntegracaoDocumental,
        Phase::Integrado,
        Phase::Cancelado,
    ];

    /// Label as rendered by the system of record.
    pub fn label(self) -> &'static str {
        match self {
            Phase::FormalizacaoDigital => "Formalização Digital",
            Phase::ProtocolarDocumentacao => "Protocolar Documentação",
            Phase::AprovacaoCorban => "Aprovação Corban",
            Phase::In100 => "IN100",
            Phase::Credito => "Crédito",
            Phase::FormalizacaoInterna => "Formalização Interna",
            Phase::Averbacao => "Averbação",
            Phase::LancamentoDoTitulo => "Lançamento do Título",
            Phase::Pago => "Pago",
            Phase::EmissaoDeCartao => "Emissão de Cartão",
            Phase::IntegracaoDocumental => "Integração Documental",
            Phase::Integrado => "Integrado",
            Phase::Cancelado => "Cancelado",
            Phase::Unidentified => "Não Identificado",
        }
    }

    /// Short operational status shown next to the phase in reports.
    pub fn status(self) -> &'static str {
        match self {
            Phase::Integrado => "CONCLUIDO",
            Phase::Pago => "PAGO",
            Phase::EmissaoDeCartao => "EM EMISSAO DE CARTAO",
            Phase::Averbacao => "AGUARD. AVERBACAO",
            Phase::IntegracaoDocumental => "DOC. EM ANDAMENTO",
            Phase::FormalizacaoDigital | Phase::FormalizacaoInterna => "FORMALIZANDO",
            Phase::AprovacaoCorban => "AGUARD. APROVACAO",
            Phase::In100 => "ANALISE IN100",
            Phase::Credito => "ANALISE CREDITO",
            Phase::ProtocolarDocumentacao => "PROTOCOLO PENDENTE",
            Phase::LancamentoDoTitulo => "AGUARD. LANCAMENTO",
            Phase::Cancelado => "CANCELADO",
            Phase::Unidentified => "VERIFICAR MANUAL.",
        }
    }

    /// Case-insensitive match against the known labels. Unknown text is
    /// `None`; callers decide whether that means `Unidentified`.
    pub fn from_label(text: &str) -> Option<Phase> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        Phase::KNOWN
            .iter()
            .copied()
            .find(|p| p.label().to_lowercase() == needle)
    }

    /// Position in declaration order, used as a stable tie-break.
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
