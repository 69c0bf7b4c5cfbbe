/*!

# Networking Interfaces and Methods

## Introduction

A node answers the same set of wallet operations over two transports:

* a REST api under `/bch`, for plain http clients
* JSON-RPC over a websocket opened at `/wsopen/<peer-id>`, for peers

Both end up in the same [`router::BchRpcRouter`] handlers, so validation, rate
limiting and error shaping are identical on either side.

## Peer RPC

Every text frame a peer sends is one request:

```json
{"jsonrpc":"2.0","id":"<string>","method":"bch","params":{"endpoint":"<name>", ...}}
```

`method` is the service, always `bch`. `params.endpoint` is the operation and
the remaining params are its arguments. The reply goes back over the same
socket:

```json
{"jsonrpc":"2.0","id":"<same id>","result":{"method":"bch","reciever":"<node id>","value":{...}}}
```

`value` is a [`response::ResponseEnvelope`]. There is no JSON-RPC `error`
member; a failed call is a `value` with `success: false`, an HTTP style
`status` and a `message`. Frames that are not requests are dropped.

Replies are not ordered, clients match them on `id`.

A peer that reconnects under an identity that is already connected takes
that identity over; the older socket stops receiving replies.

## Rate limiting

Routed requests from a peer are charged to its peer id and to the address the
socket was opened from. Picking a new peer id therefore does not buy a new
budget, and every peer behind one address shares that address' budget with
the REST callers from it.

## Fulcrum service

`method: "fulcrum"` with `endpoint: "transactions"` and `addresses` (string or
array of at most 20) returns the unsorted indexer history of each address:

```json
{"success":true,"status":200,"transactions":[{"address":"..","transactions":[{"height":..,"tx_hash":".."}]}]}
```

## Endpoints

```text
transactions | txHistory    address, sortOrder?, page?
balance                     addresses (string or array)
utxos                       address
utxosBulk                   addresses (array, at most 20)
broadcast                   hex
transaction | txData        txids (array, at most 20)
pubkey                      address
utxoIsValid                 utxo {txid, vout}
getTokenData                tokenId, withTxHistory?
getTokenData2               tokenId, updateCache?
```

Unknown endpoints are answered with a 404 envelope and are not rate limited.
History entries with a height of zero or below are unconfirmed and sort as the
newest.

## REST

`POST /bch/<endpoint>` with the params as a json object, and
`GET /bch/pubkey/<address>`. Success is the envelope with HTTP 200; failure is
`{"status": .., "error": ..}` with that status. Callers are rate limited on
their ip address.

`GET /` returns the JSON-LD announcement of the service.

*/

pub mod client;
pub mod endpoint;
pub mod filters;
pub mod handlers;
pub mod network;
pub mod peer;
pub mod response;
pub mod router;
pub mod rpc_message;
pub mod signals;
pub mod socket;
