//! Stylesheet injected at startup.
//!
//! The marker class is purely presentational: all of the hide animation lives
//! here, so the engine only ever adds or removes a class.

use crate::config::FilterConfig;

/// CSS for containers, the hidden marker and the injected toggles.
pub fn stylesheet(config: &FilterConfig) -> String {
    format!(
        r#"
{container} {{
    transition: opacity 0.3s ease-out, transform 0.3s ease-out,
                height 0.3s ease-out, width 0.3s ease-out,
                flex-basis 0.3s ease-out, min-height 0.3s ease-out,
                margin 0.3s ease-out, padding 0.3s ease-out;
    opacity: 1;
    transform: translateY(0);
    pointer-events: auto;
}}

{hidden} {{
    opacity: 0 !important;
    transform: translateY(20px) !important;
    height: 0 !important;
    width: 0 !important;
    flex-basis: 0 !important;
    min-height: 0 !important;
    margin: 0 !important;
    padding: 0 !important;
    overflow: hidden !important;
    pointer-events: none !important;
}}

.{toggle} {{
    margin-top: 0.5rem;
    padding: 0.25rem 0.75rem;
    border: 1px solid currentColor;
    border-radius: 4px;
    background: transparent;
    color: inherit;
    font-size: 0.8rem;
    cursor: pointer;
}}

.{toggle}.{toggle_blocked} {{
    color: #e5484d;
}}

.{toast} {{
    position: fixed;
    right: 1rem;
    bottom: 1rem;
    z-index: 2147483647;
    padding: 0.5rem 1rem;
    border-radius: 4px;
    background: rgba(20, 20, 20, 0.9);
    color: #fff;
    font-size: 0.9rem;
    pointer-events: auto;
}}

.{toast} .{toggle} {{
    margin: 0 0 0 0.75rem;
}}
"#,
        container = config.container_selector,
        hidden = config.hidden_selector(),
        toggle = config.toggle_class,
        toggle_blocked = config.toggle_blocked_class,
        toast = config.toast_class,
    )
}
