//! Console and lifecycle instrumentation injected into every sandboxed
//! document.

use crate::compose::find_ci;

/// Forwards console calls, uncaught errors, unhandled rejections and the
/// load event to the host as `postMessage` payloads.
pub const INSTRUMENTATION_SNIPPET: &str = r"<script>
  (function () {
    function stringify(arg) {
      if (typeof arg === 'object' && arg !== null) {
        try { return JSON.stringify(arg, null, 2); } catch (e) { return '[Unserializable]'; }
      }
      return String(arg);
    }
    function send(kind, args) {
      try {
        window.parent.postMessage({
          type: 'console',
          consoleType: kind,
          message: Array.prototype.map.call(args, stringify).join(' ')
        }, '*');
      } catch (e) {}
    }
    ['log', 'error', 'warn', 'info'].forEach(function (kind) {
      var original = console[kind];
      console[kind] = function () {
        original.apply(console, arguments);
        send(kind, arguments);
      };
    });
    window.onerror = function (msg, url, line) {
      send('error', ['Runtime Error: ' + msg + ' (Line ' + line + ')']);
      return true;
    };
    window.addEventListener('unhandledrejection', function (event) {
      send('error', ['Unhandled Promise Rejection: ' + stringify(event.reason)]);
    });
    window.addEventListener('load', function () {
      window.parent.postMessage({ type: 'renderComplete' }, '*');
    });
  })();
</script>
";

/// Insert [`INSTRUMENTATION_SNIPPET`] before `</head>`, else before `<body`,
/// else at the very start.
#[must_use]
pub fn instrument(document: &str) -> String {
    let at = find_ci(document, "</head>")
        .or_else(|| find_ci(document, "<body"))
        .unwrap_or(0);
    let mut out = String::with_capacity(document.len() + INSTRUMENTATION_SNIPPET.len());
    out.push_str(&document[..at]);
    out.push_str(INSTRUMENTATION_SNIPPET);
    out.push_str(&document[at..]);
    out
}

#[cfg(test)]
#[path = "instrument_test.rs"]
mod tests;
